// Block diagnostics - classifies provider failures
//
// The catalog only sees a tool's stderr. This module decides whether that
// text describes a temporary refusal (retry after a backoff) or a permanent
// condition (fail the job now).

use serde::{Deserialize, Serialize};

/// Reasons why the provider might refuse a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Bot detection triggered ("confirm you're not a bot")
    BotDetection,

    /// Network timeout (soft IP block)
    NetworkTimeout,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Private video requiring authorization
    PrivateVideo,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// Geographic restriction
    GeoBlocked,

    /// DRM-protected or paid content
    DrmProtected,

    /// Generic/unknown failure
    Unknown,
}

impl BlockingReason {
    /// Whether the refusal is expected to clear up on its own after a pause
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden | Self::RateLimited | Self::BotDetection | Self::NetworkTimeout
        )
    }

    /// Check if this is a permanent restriction (no workaround)
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::PrivateVideo
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "access denied (HTTP 403)",
            Self::RateLimited => "rate limited by provider",
            Self::BotDetection => "bot detection triggered",
            Self::NetworkTimeout => "network timeout (possible IP throttling)",
            Self::AgeRestricted => "age-restricted content",
            Self::PrivateVideo => "private video",
            Self::VideoUnavailable => "video unavailable",
            Self::GeoBlocked => "geographic restriction",
            Self::DrmProtected => "DRM-protected content",
            Self::Unknown => "unknown failure",
        }
    }
}

/// Analyze tool output and return the most specific matching reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    // Check patterns in order of specificity

    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("requires purchase")
        || lower.contains("youtube premium")
    {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
        || lower.contains("video is unavailable")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country") || lower.contains("blocked in your country")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
    {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("not a bot")
        || lower.contains("bot detection")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
    {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection reset")
        || lower.contains("network unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(BlockingReason::Unknown);
    }

    None
}
