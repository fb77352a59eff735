//! Path filtering for repository traversal

pub mod binary;
pub mod ignore_filter;
pub mod rules;

pub use binary::looks_binary;
pub use ignore_filter::IgnoreFilter;
pub use rules::{FileRuleSource, RuleSource};
