//! Dashboard tiles showing the current date and time.

use adminkit::widgets::{Widget, WidgetContext};
use chrono::Local;

/// Today's date, e.g. "18 October 2026".
pub struct Today;

impl Widget for Today {
    fn context(&self) -> WidgetContext {
        WidgetContext::new("fa fa-calendar", Local::now().format("%d %B %Y"), "Today")
    }
}

/// The current wall-clock time.
pub struct Time;

impl Widget for Time {
    fn context(&self) -> WidgetContext {
        WidgetContext::new("fa fa-clock", Local::now().format("%H:%M"), "Time")
    }
}

/// The ordinal day of the year.
pub struct DayOfYear;

impl Widget for DayOfYear {
    fn context(&self) -> WidgetContext {
        WidgetContext::new(
            "fa fa-calendar-day",
            Local::now().format("%j"),
            "Day of year",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_contexts() {
        assert_eq!(Today.context().text, "Today");
        assert_eq!(Time.context().value.len(), 5);
        let day: u32 = DayOfYear.context().value.parse().unwrap();
        assert!((1..=366).contains(&day));
    }
}
