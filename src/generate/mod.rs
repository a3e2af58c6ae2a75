//! Documents generated from build artifacts rather than from scanners.

mod index_image;
mod oci_copy;
mod purls;

pub use index_image::{
    index_image_sbom, IMAGE_INDEX_MEDIA_TYPE, IMAGE_INDEX_SPDX_ID, IMAGE_MANIFEST_MEDIA_TYPE,
};
pub use oci_copy::{oci_copy_sbom, parse_oci_copy, Artifact, OCI_COPY_DOCUMENT_NAME, UNKNOWN_ROOT_SPDX_ID};
pub use purls::{purl_listing, ImageContents, PurlEntry, PurlListing};
