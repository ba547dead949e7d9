#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use plurackup_core::model::{Audience, Identity, IdentityDirectory, Post, Reply};

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2011, 3, day, hour, 0, 0).unwrap()
}

pub fn post(id: i64, posted: DateTime<Utc>) -> Post {
    Post {
        id,
        posted,
        lang: "en".to_string(),
        qualifier: "says".to_string(),
        qualifier_translated: "says".to_string(),
        content_raw: format!("plurk {id}"),
        content: format!("plurk {id}"),
        favorite_count: 0,
        favorers: Vec::new(),
        replurkers_count: 0,
        replurkers: Vec::new(),
        audience: Audience::Public,
        replies: Vec::new(),
    }
}

pub fn reply(id: i64, author: i64, posted: DateTime<Utc>) -> Reply {
    Reply {
        id,
        author,
        posted,
        lang: "en".to_string(),
        qualifier: ":".to_string(),
        qualifier_translated: "".to_string(),
        content_raw: format!("reply {id}"),
        content: format!("reply {id}"),
    }
}

pub fn directory(entries: &[(i64, &str)]) -> IdentityDirectory {
    entries
        .iter()
        .map(|&(id, handle)| (id, Identity::new(handle, None)))
        .collect()
}
