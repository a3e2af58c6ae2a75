//! Flat purl listing of an image's contents.

use crate::model::Document;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurlListing {
    pub image_contents: ImageContents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageContents {
    pub dependencies: Vec<PurlEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurlEntry {
    pub purl: String,
}

/// Every non-root node carrying a purl, in document order
#[must_use]
pub fn purl_listing(document: &Document) -> PurlListing {
    let dependencies = document
        .nodes()
        .filter(|n| &n.id != document.root_id())
        .filter_map(|n| n.purl.clone())
        .map(|purl| PurlEntry { purl })
        .collect();
    PurlListing {
        image_contents: ImageContents { dependencies },
    }
}
