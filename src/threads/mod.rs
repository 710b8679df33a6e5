//! Reply-forest reconstruction.
//!
//! Reply links are flat `(feed URL, post id)` pointers persisted with each
//! post. The forest is rebuilt from a full scan on every read: resolution is
//! a deferred join over an in-memory key map, never a write-time check, so a
//! reply whose target was not (yet) ingested simply shows up as a root.

use std::collections::HashMap;

use crate::domain::{JoinedPost, PostKey};

/// One post with its resolved author/avatar and its direct replies.
///
/// Children keep the scan order of the underlying join: date descending,
/// ties broken by feed URL then id. That makes sibling order deterministic
/// across reads without a second sort.
#[derive(Debug, Clone)]
pub struct ThreadNode {
    pub id: i64,
    pub feed_url: String,
    pub title: String,
    pub text: String,
    pub date: i64,
    pub author: Option<String>,
    pub avatar: Option<String>,
    pub replies: Vec<ThreadNode>,
}

/// Build the reply forest from the date-descending joined scan.
///
/// A post whose reply target resolves against the loaded set becomes a child
/// of that target; everything else (explicit roots, dangling targets) becomes
/// a root. Roots come out newest first.
///
/// Reply cycles (a post replying to itself, or A and B replying to each
/// other) cannot hang off any root, so every member of a cycle is demoted to
/// a root; replies to a demoted post still nest beneath it as usual.
pub fn build_forest(rows: Vec<JoinedPost>) -> Vec<ThreadNode> {
    let mut index: HashMap<PostKey, usize> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        index.insert(row.post.key(), i);
    }

    // Resolved parent per row; None covers roots and dangling targets.
    let parents: Vec<Option<usize>> = rows
        .iter()
        .map(|row| {
            row.post
                .reply_to
                .as_ref()
                .and_then(|t| index.get(&(t.feed_url.clone(), t.post_id)).copied())
        })
        .collect();

    let demoted = demote_cycles(&parents);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots: Vec<usize> = Vec::new();
    for i in 0..rows.len() {
        match parents[i] {
            Some(parent) if !demoted[i] => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let mut nodes: Vec<Option<ThreadNode>> = rows
        .into_iter()
        .map(|row| {
            Some(ThreadNode {
                id: row.post.id,
                feed_url: row.post.feed_url,
                title: row.post.title,
                text: row.post.text,
                date: row.post.date,
                author: row.author,
                avatar: row.avatar,
                replies: Vec::new(),
            })
        })
        .collect();

    roots
        .iter()
        .map(|&root| assemble(root, &children, &mut nodes))
        .collect()
}

fn assemble(
    i: usize,
    children: &[Vec<usize>],
    nodes: &mut Vec<Option<ThreadNode>>,
) -> ThreadNode {
    let replies = children[i]
        .iter()
        .map(|&child| assemble(child, children, nodes))
        .collect();

    let mut node = nodes[i].take().expect("node assembled twice");
    node.replies = replies;
    node
}

/// Classify every row by walking parent pointers with an in-progress set.
/// A walk that re-enters its own path found a reply cycle; the members of
/// that cycle (and only them) are flagged for demotion to roots.
fn demote_cycles(parents: &[Option<usize>]) -> Vec<bool> {
    const WHITE: u8 = 0; // unvisited
    const GRAY: u8 = 1; // on the current walk
    const BLACK: u8 = 2; // classified

    let mut color = vec![WHITE; parents.len()];
    let mut demoted = vec![false; parents.len()];

    for start in 0..parents.len() {
        if color[start] != WHITE {
            continue;
        }

        let mut path = Vec::new();
        let mut current = start;
        loop {
            color[current] = GRAY;
            path.push(current);

            match parents[current] {
                Some(next) if color[next] == WHITE => current = next,
                Some(next) if color[next] == GRAY => {
                    let cycle_start = path
                        .iter()
                        .position(|&i| i == next)
                        .expect("gray node is on the current path");
                    for &member in &path[cycle_start..] {
                        demoted[member] = true;
                    }
                    break;
                }
                // Root, dangling target, or a chain already classified.
                _ => break,
            }
        }

        for &i in &path {
            color[i] = BLACK;
        }
    }

    demoted
}
