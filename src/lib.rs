//! Video to vector-path frames, and path frames to timed BAS overlay scripts.
//!
//! The two halves meet at the [`corpus::PathCorpus`] JSON file: [`pipeline`]
//! produces it from a video, [`timeline`] turns it into script text.

pub mod corpus;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod timeline;
pub mod utils;
pub mod vector;
