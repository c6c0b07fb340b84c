//! Corporate and free-provider domain tables
//!
//! Both tables are embedded at compile time and read-only after startup.
//! The corporate table feeds the catch-all policy: a catch-all answer from
//! a corporate domain is still reported as deliverable.

use std::collections::HashSet;

use crate::disposable::parse_domain_list;

const CORPORATE_LIST: &str = include_str!("../../../corporate_domains.txt");
const FREE_PROVIDER_LIST: &str = include_str!("../../../free_email_providers.txt");

pub struct DomainTables {
    corporate: HashSet<String>,
    free_providers: HashSet<String>,
}

impl DomainTables {
    /// Load both tables from the embedded lists.
    pub fn from_embedded_lists() -> Self {
        Self {
            corporate: parse_domain_list(CORPORATE_LIST).unwrap_or_default(),
            free_providers: parse_domain_list(FREE_PROVIDER_LIST).unwrap_or_default(),
        }
    }

    /// A domain is corporate when it is on the allow-list or belongs to
    /// the `.edu` / `.gov` namespaces.
    pub fn is_corporate(&self, domain: &str) -> bool {
        let normalized = domain.to_lowercase();
        self.corporate.contains(&normalized)
            || normalized.ends_with(".edu")
            || normalized.ends_with(".gov")
    }

    pub fn is_free_provider(&self, domain: &str) -> bool {
        self.free_providers.contains(&domain.to_lowercase())
    }

    pub fn corporate_count(&self) -> usize {
        self.corporate.len()
    }

    pub fn free_provider_count(&self) -> usize {
        self.free_providers.len()
    }
}

impl Default for DomainTables {
    fn default() -> Self {
        Self::from_embedded_lists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corporate_membership_is_case_insensitive() {
        let tables = DomainTables::from_embedded_lists();
        assert!(tables.is_corporate("microsoft.com"));
        assert!(tables.is_corporate("Microsoft.COM"));
        assert!(!tables.is_corporate("randomcorp.xyz"));
    }

    #[test]
    fn edu_and_gov_are_corporate() {
        let tables = DomainTables::from_embedded_lists();
        assert!(tables.is_corporate("cs.stanford.edu"));
        assert!(tables.is_corporate("nasa.gov"));
        assert!(!tables.is_corporate("education.example.com"));
    }

    #[test]
    fn free_provider_detection() {
        let tables = DomainTables::from_embedded_lists();
        assert!(tables.is_free_provider("gmail.com"));
        assert!(tables.is_free_provider("Yahoo.com"));
        assert!(!tables.is_free_provider("acme.co"));
    }

    #[test]
    fn tables_are_non_empty() {
        let tables = DomainTables::from_embedded_lists();
        assert!(tables.corporate_count() > 10);
        assert!(tables.free_provider_count() > 10);
    }
}
