use std::sync::OnceLock;

use time::macros::format_description;

/// The local offset is looked up once. The lookup may fail once the process runs more than one thread, see
/// [`time::UtcOffset::current_local_offset`].
pub fn local_offset() -> Result<time::UtcOffset, time::error::IndeterminateOffset> {
    static CACHE: OnceLock<Result<time::UtcOffset, time::error::IndeterminateOffset>> =
        OnceLock::new();
    *CACHE.get_or_init(time::UtcOffset::current_local_offset)
}

pub trait OffsetDateTimeExt {
    fn to_local(self) -> time::Result<time::OffsetDateTime>;

    /// Formats as `2024-05-01 14:00:00` in local time.
    fn format_local(self) -> time::Result<String>;
}

impl OffsetDateTimeExt for time::OffsetDateTime {
    fn to_local(self) -> time::Result<time::OffsetDateTime> {
        Ok(self.to_offset(local_offset()?))
    }

    fn format_local(self) -> time::Result<String> {
        Ok(format_date_time(self.to_local()?)?)
    }
}

fn format_date_time(value: time::OffsetDateTime) -> Result<String, time::error::Format> {
    value.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
}

/// Formats as `+02:00`.
pub fn format_offset(offset: time::UtcOffset) -> Result<String, time::error::Format> {
    offset.format(format_description!(
        "[offset_hour sign:mandatory]:[offset_minute]"
    ))
}
