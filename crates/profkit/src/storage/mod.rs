mod schema;
mod writer;

pub use schema::{SCHEMA_VERSION, get_meta, is_profile};
pub use writer::{
    CallEntry, HeapEntry, ProfileSummary, ProfileWriter, open_profile, query_summary,
    query_top_calls, query_top_heap,
};
