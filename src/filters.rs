/// Dashboard filtering, search, pagination, and stats

use chrono::{DateTime, Duration, Utc};

use crate::clip::{Clip, MediaType};

pub const CLIPS_PER_PAGE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    All,
    Today,
    Week,
}

/// Media filter. `Text` also matches clips with no media type, since plain
/// text clips omit it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaFilter {
    #[default]
    All,
    Text,
    Image,
    Screenshot,
    File,
}

impl MediaFilter {
    fn matches(self, media_type: Option<MediaType>) -> bool {
        match self {
            MediaFilter::All => true,
            MediaFilter::Text => matches!(media_type, None | Some(MediaType::Text)),
            MediaFilter::Image => media_type == Some(MediaType::Image),
            MediaFilter::Screenshot => media_type == Some(MediaType::Screenshot),
            MediaFilter::File => media_type == Some(MediaType::File),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipFilter {
    pub time: TimeFilter,
    pub media: MediaFilter,
    /// Case-insensitive substring over text, title, and url.
    pub query: String,
}

impl ClipFilter {
    fn matches(&self, clip: &Clip, now: DateTime<Utc>) -> bool {
        if !self.media.matches(clip.media_type) {
            return false;
        }
        if !self.matches_time(clip, now) {
            return false;
        }
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        clip.text.to_lowercase().contains(&query)
            || clip.title.to_lowercase().contains(&query)
            || clip.url.to_lowercase().contains(&query)
    }

    fn matches_time(&self, clip: &Clip, now: DateTime<Utc>) -> bool {
        let cutoff = match self.time {
            TimeFilter::All => return true,
            // Start of the current UTC day.
            TimeFilter::Today => match now.date_naive().and_hms_opt(0, 0, 0) {
                Some(start) => start.and_utc(),
                None => return true,
            },
            TimeFilter::Week => now - Duration::days(7),
        };
        // Unparseable timestamps are excluded by time filters, not shown.
        DateTime::parse_from_rfc3339(&clip.timestamp)
            .map(|timestamp| timestamp.with_timezone(&Utc) >= cutoff)
            .unwrap_or(false)
    }
}

/// Clips matching the filter, in the order the backend returned them.
pub fn apply_filters<'a>(clips: &'a [Clip], filter: &ClipFilter, now: DateTime<Utc>) -> Vec<&'a Clip> {
    clips.iter().filter(|clip| filter.matches(clip, now)).collect()
}

pub fn page_count(total: usize) -> usize {
    total.div_ceil(CLIPS_PER_PAGE).max(1)
}

/// The clips on `page` (zero-based). Out-of-range pages are empty.
pub fn page_slice<'a>(clips: &[&'a Clip], page: usize) -> Vec<&'a Clip> {
    clips
        .iter()
        .skip(page * CLIPS_PER_PAGE)
        .take(CLIPS_PER_PAGE)
        .copied()
        .collect()
}

/// Headline numbers shown above the clip list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub clips: usize,
    pub words: usize,
    pub domains: usize,
}

pub fn dashboard_stats(clips: &[Clip]) -> DashboardStats {
    let mut domains: Vec<&str> = clips
        .iter()
        .map(|clip| clip.domain.as_str())
        .filter(|domain| !domain.is_empty())
        .collect();
    domains.sort_unstable();
    domains.dedup();
    DashboardStats {
        clips: clips.len(),
        words: clips.iter().map(|clip| clip.word_count).sum(),
        domains: domains.len(),
    }
}

/// Rough token estimate for injected context: words times 1.3.
pub fn token_estimate(words: usize) -> usize {
    (words as f64 * 1.3).round() as usize
}
