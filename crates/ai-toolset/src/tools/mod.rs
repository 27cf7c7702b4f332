//! Built-in tool implementations.

mod automation;
mod calendar;
mod code_executor;
mod music;
mod travel_time;
mod url_fetch;
mod web_search;

pub use automation::CreateAutomation;
pub use calendar::{parse_datetime, parse_duration, CalendarAddEvent, CalendarGetEvents, CalendarUpdateEvent};
pub use code_executor::CodeExecutor;
pub use music::{MediaMatch, MusicFind, MusicPlay};
pub use travel_time::{GetTravelDistance, GetTravelTime};
pub use url_fetch::UrlFetch;
pub use web_search::WebSearch;
