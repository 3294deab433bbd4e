//! Request-forgery tokens and edit permissions consulted by the save hook.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};

use crate::application::context::Principal;
use crate::domain::types::PostId;

const TOKEN_LEN: usize = 20;

/// Action a save nonce is bound to.
pub fn post_nonce_action(post_id: PostId) -> String {
    format!("mdtoggle_post_{post_id}")
}

pub trait NonceService: Send + Sync {
    fn issue(&self, action: &str, principal: &Principal) -> String;

    fn verify(&self, token: &str, action: &str, principal: &Principal) -> bool;
}

pub trait PostPermissions: Send + Sync {
    fn can_edit_post(&self, principal: &Principal, post_id: PostId) -> bool;
}

/// Tick-based keyed hash tokens. A token stays valid for the tick it was
/// issued in and the one after, so its lifetime is between half and one full
/// `lifetime`.
#[derive(Debug, Clone)]
pub struct HashNonce {
    secret: String,
    lifetime: Duration,
}

impl HashNonce {
    pub fn new(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            lifetime,
        }
    }

    pub fn issue_at(&self, now: OffsetDateTime, action: &str, principal: &Principal) -> String {
        self.token(self.tick(now), action, principal)
    }

    pub fn verify_at(
        &self,
        now: OffsetDateTime,
        token: &str,
        action: &str,
        principal: &Principal,
    ) -> bool {
        if token.len() != TOKEN_LEN {
            return false;
        }

        let tick = self.tick(now);
        [tick, tick - 1].into_iter().any(|candidate| {
            let expected = self.token(candidate, action, principal);
            bool::from(expected.as_bytes().ct_eq(token.as_bytes()))
        })
    }

    fn tick(&self, now: OffsetDateTime) -> i64 {
        let half = (self.lifetime.whole_seconds() / 2).max(1);
        let seconds = now.unix_timestamp();
        let tick = seconds.div_euclid(half);
        if seconds.rem_euclid(half) > 0 {
            tick + 1
        } else {
            tick
        }
    }

    fn token(&self, tick: i64, action: &str, principal: &Principal) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"|");
        hasher.update(tick.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(action.as_bytes());
        hasher.update(b"|");
        hasher.update(principal.name().as_bytes());
        let digest = hex::encode(hasher.finalize().to_vec());
        digest[..TOKEN_LEN].to_string()
    }
}

impl NonceService for HashNonce {
    fn issue(&self, action: &str, principal: &Principal) -> String {
        self.issue_at(OffsetDateTime::now_utc(), action, principal)
    }

    fn verify(&self, token: &str, action: &str, principal: &Principal) -> bool {
        self.verify_at(OffsetDateTime::now_utc(), token, action, principal)
    }
}

/// Fixed set of principals allowed to edit every post.
#[derive(Debug, Clone, Default)]
pub struct EditorRoster {
    editors: HashSet<String>,
}

impl EditorRoster {
    pub fn new<I, S>(editors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            editors: editors.into_iter().map(Into::into).collect(),
        }
    }
}

impl PostPermissions for EditorRoster {
    fn can_edit_post(&self, principal: &Principal, _post_id: PostId) -> bool {
        !principal.is_anonymous() && self.editors.contains(principal.name())
    }
}
