//! A single binding site occurrence: a base name plus its star flag.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingSite {
    pub name: String,
    pub is_star: bool,
}

impl BindingSite {
    pub fn new(name: impl Into<String>, is_star: bool) -> Self {
        Self {
            name: name.into(),
            is_star,
        }
    }

    /// Render as the textual form, e.g. "a" or "a*".
    pub fn to_token(&self) -> String {
        if self.is_star {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn parse(token: &str) -> Self {
        match token.strip_suffix('*') {
            Some(base) => BindingSite::new(base, true),
            None => BindingSite::new(token, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_suffix_round_trips() {
        let site = BindingSite::parse("a*");
        assert_eq!(site.name, "a");
        assert!(site.is_star);
        assert_eq!(site.to_token(), "a*");
    }

    #[test]
    fn unstarred_round_trips() {
        let site = BindingSite::parse("b");
        assert!(!site.is_star);
        assert_eq!(site.to_token(), "b");
    }
}
