pub mod builders;
pub mod policy_dir;

pub use builders::{ClaimsBuilder, RuleBuilder};
pub use policy_dir::TestPolicyDir;
