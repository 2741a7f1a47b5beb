use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Names with more segments than this are shortened unless verbose
const MAX_UNTRUNCATED_SEGMENTS: usize = 3;

/// Formats records as `log: <logger-name>: [<LEVEL>] <message>`
#[derive(Debug, Clone, Copy)]
pub struct LogLineFormat {
    verbose: bool,
}

impl LogLineFormat {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl<S, N> FormatEvent<S, N> for LogLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            writer,
            "log: {}: [{}] ",
            logger_name(metadata.target(), self.verbose),
            metadata.level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Dotted display name for a tracing target
pub fn logger_name(target: &str, verbose: bool) -> String {
    let dotted = target.replace("::", ".");
    if verbose {
        dotted
    } else {
        truncate_name(&dotted)
    }
}

/// Shorten `a.b.c.d.e` to `a.b..e`; names of three or fewer segments pass through
pub fn truncate_name(name: &str) -> String {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() <= MAX_UNTRUNCATED_SEGMENTS {
        return name.to_string();
    }
    format!(
        "{}.{}..{}",
        segments[0],
        segments[1],
        segments[segments.len() - 1]
    )
}
