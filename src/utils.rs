use crate::config::DelaySettings;
use rand::Rng;
use std::time::Duration;

/// Random duration within the configured bounds
pub fn random_delay(settings: &DelaySettings) -> Duration {
    let min = settings.min_secs.max(0.0);
    let max = settings.max_secs.max(min);
    if max <= min {
        return Duration::from_secs_f64(min);
    }
    let secs = rand::thread_rng().gen_range(min..=max);
    Duration::from_secs_f64(secs)
}

/// Pause before hitting a third-party site again
pub async fn polite_delay(settings: &DelaySettings) {
    let delay = random_delay(settings);
    ::log::debug!("Waiting {:.1}s before the next lookup", delay.as_secs_f64());
    tokio::time::sleep(delay).await;
}

/// Convert a URL to a sanitized filename
pub fn sanitize_filename(url: &str) -> String {
    // Remove protocol and replace invalid filename characters
    let mut name = url.replace("http://", "").replace("https://", "");
    name = name.replace(['/', ':', '?', '&', '=', '#', '%'], "_");

    // Limit filename length on a char boundary
    match name.char_indices().nth(100) {
        Some((end, _)) => name[..end].to_string(),
        None => name,
    }
}
