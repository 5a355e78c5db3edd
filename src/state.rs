use std::sync::Arc;

use crate::{document::FontSource, jwt::SessionKeys, media::MediaStorage, store::Store};

/// Everything a handler needs besides the request itself.
#[derive(Clone)]
pub struct State {
    pub store: Arc<dyn Store>,
    pub media: MediaStorage,
    pub sessions: SessionKeys,
    pub font: FontSource,
}

impl State {
    pub fn new(
        store: Arc<dyn Store>,
        media: MediaStorage,
        sessions: SessionKeys,
        font: FontSource,
    ) -> Self {
        Self {
            store,
            media,
            sessions,
            font,
        }
    }
}
