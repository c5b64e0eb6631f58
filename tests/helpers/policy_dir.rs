use catalog_access::access::loader::load_policies;
use catalog_access::access::AccessPolicy;
use std::path::Path;
use tempfile::TempDir;

/// The catalog every integration test starts from.
pub const CATALOG_KDL: &str = r#"
catalog {
    entry "kurzy" {
        entry "daweb" access="claim" title="Web apps" lessons=12 {
            entry "zaklady-ts" access="claim" title="TypeScript basics"
            entry "novinky" draft=#true {
                authors {
                    - "alice"
                }
            }
        }
        entry "jinykurz" access="claim" lessons=3
        entry "komunita" access="logged-in"
        entry "archiv" access="deny"
    }
}
"#;

/// Policy directory with automatic cleanup
pub struct TestPolicyDir {
    dir: TempDir,
}

impl TestPolicyDir {
    /// Create a new policy directory holding `catalog.kdl`
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let this = Self { dir };
        this.write("catalog.kdl", CATALOG_KDL);
        this
    }

    pub fn write(&self, file_name: &str, contents: &str) -> &Self {
        std::fs::write(self.dir.path().join(file_name), contents)
            .expect("Failed to write policy file");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn load(&self) -> AccessPolicy {
        load_policies(self.path()).expect("Failed to load policies")
    }
}
