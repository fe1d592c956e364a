// Concrete collaborators backed by yt-dlp and plain HTTP
//
// - YtDlpCatalog: stream listings and playlist metadata (`--dump-json`)
// - YtDlpStreamDownloader: fetch one format id with yt-dlp
// - HttpStreamDownloader: fetch a format's direct URL with reqwest
// - diagnostics: classify tool stderr into transient / permanent refusals

pub mod diagnostics;
mod http;
mod ytdlp;

pub use diagnostics::{diagnose_error, BlockingReason};
pub use http::HttpStreamDownloader;
pub use ytdlp::{parse_listing, parse_playlist, YtDlpCatalog, YtDlpCommand, YtDlpStreamDownloader};
