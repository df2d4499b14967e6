use std::collections::HashMap;

use thiserror::Error;

use crate::db::models::ForumReply;
use crate::repositories::forum::ReplyWithAuthor;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum NestingError {
    #[error("parent reply belongs to a different post")]
    OtherPost,
}

/// Anything that can be arranged into a reply thread.
pub(crate) trait Threaded {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
}

impl Threaded for ReplyWithAuthor {
    fn id(&self) -> &str {
        &self.reply.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.reply.parent_reply_id.as_deref()
    }
}

#[derive(Debug)]
pub(crate) struct Thread<T> {
    pub(crate) reply: T,
    pub(crate) children: Vec<T>,
}

/// The parent a new reply is stored under. Replies nest one level only, so
/// answering a nested reply attaches to its top-level ancestor.
pub(crate) fn effective_parent(post_id: &str, parent: &ForumReply) -> Result<String, NestingError> {
    if parent.post_id != post_id {
        return Err(NestingError::OtherPost);
    }
    Ok(parent.parent_reply_id.clone().unwrap_or_else(|| parent.id.clone()))
}

/// Groups replies (already in display order) into top-level threads with
/// their direct children. Deeper rows are lifted to their root ancestor and
/// children whose ancestor is missing become top-level.
pub(crate) fn build_threads<T: Threaded>(replies: Vec<T>) -> Vec<Thread<T>> {
    let parents: HashMap<String, Option<String>> = replies
        .iter()
        .map(|reply| (reply.id().to_string(), reply.parent_id().map(str::to_string)))
        .collect();

    let root_of = |id: &str| -> Option<String> {
        let mut current = id.to_string();
        for _ in 0..parents.len() {
            match parents.get(&current) {
                Some(Some(parent)) if parents.contains_key(parent) => current = parent.clone(),
                Some(_) => return Some(current),
                None => return None,
            }
        }
        None
    };

    let mut threads: Vec<Thread<T>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut pending: Vec<(String, T)> = Vec::new();

    for reply in replies {
        let root = root_of(reply.id()).unwrap_or_else(|| reply.id().to_string());
        if root == reply.id() {
            index.insert(root, threads.len());
            threads.push(Thread { reply, children: Vec::new() });
        } else {
            pending.push((root, reply));
        }
    }

    for (root, reply) in pending {
        match index.get(&root) {
            Some(&position) => threads[position].children.push(reply),
            None => threads.push(Thread { reply, children: Vec::new() }),
        }
    }

    threads
}
