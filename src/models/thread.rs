// src/models/thread.rs

//! Board-facing values: what gets posted and what comes back.

/// A rendered post ready for the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub mail: String,
    pub bbs: String,
    /// Epoch seconds sent as the `time` field
    pub time: i64,
    /// Thread number to append to; `None` creates a new thread
    pub key: Option<String>,
    pub shift_jis: bool,
}

impl ThreadInfo {
    pub fn is_create(&self) -> bool {
        self.key.as_deref().is_none_or(str::is_empty)
    }

    /// Target an existing thread.
    pub fn into_reply(self, key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..self
        }
    }

    /// Prefix the body with the board's title-change directive.
    pub fn with_title_change(self) -> Self {
        let body = format!("!chtt{}\n\n{}", self.subject, self.body);
        Self { body, ..self }
    }
}

/// Identity of a thread the board just created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedThread {
    pub url: String,
    pub number: String,
}

/// What a thread page currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadPage {
    /// 404 or equivalent
    Gone,
    Live {
        title: String,
        last_reply: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ThreadInfo {
        ThreadInfo {
            subject: "【地震】東京湾 震度3 M4.1".into(),
            body: "body".into(),
            from: "佐藤".into(),
            mail: String::new(),
            bbs: "eq".into(),
            time: 0,
            key: None,
            shift_jis: false,
        }
    }

    #[test]
    fn test_reply_and_title_change() {
        let t = info();
        assert!(t.is_create());
        let t = t.into_reply("1700000000").with_title_change();
        assert!(!t.is_create());
        assert_eq!(t.body, "!chtt【地震】東京湾 震度3 M4.1\n\nbody");
    }

    #[test]
    fn test_empty_key_is_create() {
        let t = info().into_reply("");
        assert!(t.is_create());
    }
}
