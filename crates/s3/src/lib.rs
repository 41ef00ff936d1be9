//! blobsync-s3: S3 backend for blobsync
//!
//! This crate provides the implementation of the BlobStore trait
//! using the aws-sdk-s3 crate. It is the only crate that directly
//! depends on the AWS SDK. Containers map to buckets and blobs to objects.

pub mod client;
mod listing;

pub use client::S3BlobStore;
