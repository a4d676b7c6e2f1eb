pub mod extractor;
pub mod fetcher;
pub mod http;
pub mod submitter;

pub use extractor::ListingExtractor;
pub use fetcher::ReqwestListingFetcher;
pub use http::build_client;
pub use submitter::ReqwestSubmitter;
