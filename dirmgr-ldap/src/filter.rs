// SPDX-License-Identifier: MIT OR Apache-2.0

//! Search filters and attribute access for Active Directory entries.
use std::collections::HashMap;

use ldap3::ldap_escape;

/// Any group.
pub const GROUPS: &str = "(objectClass=group)";

/// Groups carrying a numeric id.
pub const POSIX_GROUPS: &str = "(&(objectClass=group)(gidNumber=*))";

/// Request no attributes at all.
pub const NO_ATTRIBUTES: &str = "1.1";

pub fn group_by_name(name: &str) -> String {
    format!("(&(objectClass=group)(cn={}))", ldap_escape(name))
}

pub fn user_by_account(username: &str) -> String {
    format!(
        "(&(objectCategory=person)(sAMAccountName={}))",
        ldap_escape(username)
    )
}

pub fn group_with_member(member: &str) -> String {
    format!("(&(objectClass=group)(member={}))", ldap_escape(member))
}

/// Values of an attribute. Servers may return attribute names in a different case than
/// requested.
pub fn values<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> &'a [String] {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
        .unwrap_or_default()
}

pub fn first_value<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    values(attrs, name).first().map(String::as_str)
}
