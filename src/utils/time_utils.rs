use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// 东八区偏移秒数（穀倉所在地为 UTC+8）
pub const LOCAL_OFFSET_SECONDS: i32 = 8 * 3600;

/// 表单日期时间格式 `YYYY-MM-DDTHH:MM`
pub const FORM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// 检查项时间格式 `HH:MM`
pub const ITEM_TIME_FORMAT: &str = "%H:%M";

/// 展示用时间格式
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// 返回东八区 `FixedOffset` 对象
#[inline]
pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECONDS).expect("Valid offset")
}

/// 当前本地时间 `DateTime<FixedOffset>`
#[inline]
pub fn now_local() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&local_offset())
}

/// 将 `DateTime<Utc>` 转换为本地时间
#[inline]
pub fn to_local(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.with_timezone(&local_offset())
}

/// 将任意时区 DateTime 格式化为本地时间字符串
#[inline]
pub fn format_local<Tz: TimeZone>(dt: DateTime<Tz>, fmt: &str) -> String {
    dt.with_timezone(&local_offset()).format(fmt).to_string()
}

/// 展示用的本地时间字符串，例如 `2024/02/10 09:30:00`
#[inline]
pub fn format_display(dt: DateTime<Utc>) -> String {
    format_local(dt, DISPLAY_FORMAT)
}

/// 日期部分 `YYYY-MM-DD`，用于匯出文件名
#[inline]
pub fn format_date(dt: DateTime<Utc>) -> String {
    format_local(dt, "%Y-%m-%d")
}

/// UTC 时间转为微秒时间戳（存储用）
#[inline]
pub fn to_micros(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_micros()
}

/// 微秒时间戳转回 UTC 时间
#[inline]
pub fn from_micros(us: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(us)
}
