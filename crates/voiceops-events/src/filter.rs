use std::collections::HashSet;

/// Allow-list of caller phone numbers
#[derive(Clone, Debug, Default)]
pub struct PhoneFilter {
    /// Numbers to let through (empty = all)
    allowed: HashSet<String>,
}

impl PhoneFilter {
    pub fn new<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: numbers.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a phone number may produce an alert
    pub fn allows(&self, phone: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(phone)
    }
}
