//! Integration tests spanning chunking, caching, search and extraction.

mod pipeline;
