//! Who may talk to the bot.
//!
//! `telegram.allow_users` defaults to `["*"]`. An explicitly empty list
//! locks everyone out. Entries may include or omit the leading `@`.

/// `true` when `entry` names this sender.
///
/// - `"*"` matches everyone
/// - `"@alice"` / `"alice"` match the username exactly (case-sensitive, as Telegram)
/// - `"123456789"` matches the numeric user id
pub fn matches_entry(entry: &str, username: Option<&str>, user_id: &str) -> bool {
    let entry = entry.trim().trim_start_matches('@');
    if entry.is_empty() {
        return false;
    }
    entry == "*" || entry == user_id || username.is_some_and(|u| u == entry)
}

pub fn is_allowed(allow_users: &[String], username: Option<&str>, user_id: &str) -> bool {
    allow_users
        .iter()
        .any(|entry| matches_entry(entry, username, user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_list_denies_everyone() {
        assert!(!is_allowed(&[], Some("alice"), "111"));
    }

    #[test]
    fn wildcard_admits_senders_without_username() {
        assert!(is_allowed(&list(&["*"]), None, "999"));
    }

    #[test]
    fn username_with_or_without_at() {
        assert!(is_allowed(&list(&["@alice"]), Some("alice"), "1"));
        assert!(is_allowed(&list(&["alice"]), Some("alice"), "1"));
        assert!(!is_allowed(&list(&["alice"]), Some("Alice"), "1"));
        assert!(!is_allowed(&list(&["alice"]), None, "1"));
    }

    #[test]
    fn numeric_id() {
        let l = list(&["123456789", "bob"]);
        assert!(is_allowed(&l, None, "123456789"));
        assert!(is_allowed(&l, Some("bob"), "5"));
        assert!(!is_allowed(&l, Some("carol"), "5"));
    }

    #[test]
    fn blank_entry_matches_nobody() {
        assert!(!is_allowed(&list(&["", "@"]), Some(""), ""));
    }
}
