/// Builder for a `claims` node, optionally registering the login as well
pub struct ClaimsBuilder {
    login: String,
    claims: Vec<String>,
    registered: bool,
}

impl ClaimsBuilder {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            claims: Vec::new(),
            registered: false,
        }
    }

    pub fn claim(mut self, claim: &str) -> Self {
        self.claims.push(claim.to_string());
        self
    }

    pub fn registered(mut self) -> Self {
        self.registered = true;
        self
    }

    pub fn to_kdl(&self) -> String {
        let mut kdl = format!("claims {} {{\n", quote(&self.login));
        for claim in &self.claims {
            kdl.push_str(&format!("    - {}\n", quote(claim)));
        }
        kdl.push_str("}\n");
        if self.registered {
            kdl.push_str(&format!("registered {{\n    - {}\n}}\n", quote(&self.login)));
        }
        kdl
    }
}

/// Builder for a `rule` node
pub struct RuleBuilder {
    query: String,
    after: Option<String>,
    until: Option<String>,
}

impl RuleBuilder {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            after: None,
            until: None,
        }
    }

    pub fn after(mut self, at: &str) -> Self {
        self.after = Some(at.to_string());
        self
    }

    pub fn until(mut self, at: &str) -> Self {
        self.until = Some(at.to_string());
        self
    }

    pub fn text(&self) -> String {
        let mut words = Vec::new();
        if let Some(after) = &self.after {
            words.push(format!("after {after}"));
        }
        if let Some(until) = &self.until {
            words.push(format!("until {until}"));
        }
        words.push(self.query.clone());
        words.join(" ")
    }

    pub fn to_kdl(&self) -> String {
        format!("rule {}\n", quote(&self.text()))
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).expect("Failed to quote KDL string")
}
