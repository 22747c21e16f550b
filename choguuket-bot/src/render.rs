//! User-facing message texts.
//!
//! Everything sent with Markdown parse mode goes through [`escape_markdown`] first, since
//! route names come straight from user input.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use choguuket_core::{MatchSet, RequestId, Trip, TripRequest};
use std::fmt::Write;

pub const TRIP_CREATED: &str = "Поездка создана ✅";
pub const SEARCHING: &str = "Ищу поездки по запросу:";
pub const NO_TRIPS_YET: &str =
    "Пока нет поездок по Вашему запросу, как только появится поездка я Вам сообщу";
pub const RESULTS_EXPIRED: &str = "Результаты поиска устарели, отправьте запрос заново";
pub const NEW_TRIP_FOUND: &str = "Появилась новая поездка по Вашему запросу 🎉";
pub const GREETING: &str = "Привет! Я помогу найти попутку или попутчиков.\n\
                            Создайте поездку или найдите подходящую с помощью кнопок ниже.";
pub const CREATE_TRIP_BUTTON: &str = "🚗 Создать поездку";
pub const SEARCH_TRIP_BUTTON: &str = "🔍 Найти поездку";
pub const MORE_BUTTON: &str = "Ещё";

const TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Legacy Markdown only treats these four characters as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    offset: FixedOffset,
}

impl Renderer {
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!("Invalid UTC offset {} minutes, rendering in UTC", utc_offset_minutes);
                Utc.fix()
            });
        Self { offset }
    }

    pub fn time(&self, time: DateTime<Utc>) -> String {
        time.with_timezone(&self.offset).format(TIME_FORMAT).to_string()
    }

    pub fn trip(&self, trip: &Trip) -> String {
        format!(
            "🚗 {} → {}\n🕒 {}\n💺 Свободных мест: {}",
            escape_markdown(&trip.origin),
            escape_markdown(&trip.destination),
            self.time(trip.departure_time),
            trip.seats
        )
    }

    pub fn trip_request(&self, request: &TripRequest) -> String {
        format!(
            "📍 {} → {}\n🕒 {}",
            escape_markdown(&request.origin),
            escape_markdown(&request.destination),
            self.time(request.desired_time)
        )
    }

    pub fn searching(&self, request: &TripRequest) -> String {
        format!("{}\n{}", SEARCHING, self.trip_request(request))
    }

    /// One page of search results with a contact link per driver.
    pub fn match_page(&self, matches: &MatchSet, offset: usize, page_size: usize) -> String {
        let mut text = format!("Найдено поездок: {}\n", matches.len());
        for (index, stored) in matches.page(offset, page_size).iter().enumerate() {
            let _ = write!(
                text,
                "\n{}. {}\n[Написать водителю](tg://user?id={})\n",
                offset + index + 1,
                self.trip(&stored.trip),
                stored.trip.chat_id
            );
        }
        text
    }
}

/// Callback data of the "more results" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoreCallback {
    pub request_id: RequestId,
    pub offset: usize,
}

impl MoreCallback {
    const PREFIX: &'static str = "more";

    pub fn encode(&self) -> String {
        format!("{}:{}:{}", Self::PREFIX, self.request_id, self.offset)
    }

    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        if parts.next()? != Self::PREFIX {
            return None;
        }
        let request_id = RequestId(parts.next()?.parse().ok()?);
        let offset = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { request_id, offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use choguuket_core::{ChatId, StoredTrip, TripId};

    fn trip(origin: &str) -> Trip {
        Trip {
            origin: origin.into(),
            destination: "Osh".into(),
            departure_time: Utc.with_ymd_and_hms(2030, 5, 1, 4, 0, 0).unwrap(),
            seats: 2,
            chat_id: ChatId(77),
        }
    }

    #[test]
    fn test_trip_summary_uses_local_time() {
        let text = Renderer::new(360).trip(&trip("Bishkek"));
        assert_eq!(text, "🚗 Bishkek → Osh\n🕒 01.05.2030 10:00\n💺 Свободных мест: 2");
    }

    #[test]
    fn test_markdown_is_escaped() {
        assert_eq!(escape_markdown("a_b*c`d[e]"), "a\\_b\\*c\\`d\\[e]");
        let text = Renderer::new(0).trip(&trip("Kara_Balta"));
        assert!(text.starts_with("🚗 Kara\\_Balta → Osh"));
    }

    #[test]
    fn test_match_page_numbers_continue_across_pages() {
        let matches: MatchSet = (1..=3)
            .map(|id| StoredTrip { id: TripId(id), trip: trip("Bishkek") })
            .collect();
        let text = Renderer::new(360).match_page(&matches, 2, 2);
        assert!(text.starts_with("Найдено поездок: 3\n"));
        assert!(text.contains("\n3. 🚗 Bishkek"));
        assert!(!text.contains("\n1. "));
        assert!(text.contains("tg://user?id=77"));
    }

    #[test]
    fn test_more_callback_round_trip_and_rejects_garbage() {
        let callback = MoreCallback { request_id: RequestId(12), offset: 5 };
        assert_eq!(callback.encode(), "more:12:5");
        assert_eq!(MoreCallback::parse("more:12:5"), Some(callback));
        assert_eq!(MoreCallback::parse("less:12:5"), None);
        assert_eq!(MoreCallback::parse("more:x:5"), None);
        assert_eq!(MoreCallback::parse("more:12:5:1"), None);
    }
}
