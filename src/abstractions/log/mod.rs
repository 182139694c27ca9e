/*!

# Overview

Leveled, threshold-filtered logging for the heap. Every message has a _level_ (what kind of message it is) and a
numeric _threshold_ (how chatty it is). A message is emitted only if its threshold is at most the global logging
threshold, so raising the global threshold makes the collector more verbose.

```
use geece::log::*;

set_global_logging_threshold(1);

info!(1, "collection finished");     // Emitted
debug!(4, "visiting object obj#3");  // Not emitted
warning!("arena nearly exhausted");  // Threshold 0, always emitted
```

## Threshold

The global threshold is shared by all levels and defaults to 2. It can also be seeded from the
`GEECE_LOG_THRESHOLD` environment variable, which is read once when the logger is first used. Thresholds used inside
the crate:

| threshold | what is logged                                        |
|:----------|:------------------------------------------------------|
| 0         | out of memory, invariant violations                   |
| 1         | one summary line per collection                       |
| 2         | heap initialization and teardown                      |
| 3         | root table growth, watermark-triggered collections    |
| 4         | individual objects reclaimed by release or sweep      |

## Levels

Critical, Error, Warning, Info, Debug, Trace. A critical message is an error event carrying `critical = true`, which
the formatter prints with a `[CRITICAL]` prefix.

Macro syntax:

```ignore
level!(threshold, "format string", args...);
level!("format string", args...); // threshold 0
```

The macros initialize the logger on demand; no explicit setup is required.

*/
mod formatter;
mod threshold_filter;
mod macros;

use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::Lazy;
use tracing_subscriber::{
  fmt,
  layer::SubscriberExt,
  Registry
};

use threshold_filter::ThresholdFilterLayer;
use formatter::HeapFieldFormatter;
pub use macros::*;

/// Name of the environment variable consulted for the initial threshold.
pub const THRESHOLD_ENV_VAR: &str = "GEECE_LOG_THRESHOLD";

const DEFAULT_THRESHOLD: u8 = 2;

static GLOBAL_LOGGING_THRESHOLD: AtomicU8 = AtomicU8::new(DEFAULT_THRESHOLD);

static INIT_LOGGER: Lazy<()> = Lazy::new(|| {
  if let Some(threshold) = threshold_from_env() {
    set_global_logging_threshold(threshold);
  }

  let subscriber = Registry::default()
      .with(ThresholdFilterLayer)
      .with(
        fmt::layer()
            .fmt_fields(HeapFieldFormatter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stdout),
      );

  // Another subscriber may already be installed by the embedding runtime. In that case our events go to it.
  let _ = tracing::subscriber::set_global_default(subscriber);
});

fn threshold_from_env() -> Option<u8> {
  std::env::var(THRESHOLD_ENV_VAR)
      .ok()
      .and_then(|value| value.trim().parse::<u8>().ok())
}

/// Installs the subscriber. Called by the logging macros; calling it directly is harmless.
pub fn init_logger() {
  Lazy::force(&INIT_LOGGER);
}

pub fn set_global_logging_threshold(new_threshold: u8) {
  GLOBAL_LOGGING_THRESHOLD.store(new_threshold, Ordering::SeqCst);
}

pub fn get_global_logging_threshold() -> u8 {
  GLOBAL_LOGGING_THRESHOLD.load(Ordering::SeqCst)
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_round_trip() {
    let previous = get_global_logging_threshold();

    set_global_logging_threshold(5);
    assert_eq!(get_global_logging_threshold(), 5);
    info!(5, "emitted at threshold {}", 5);
    trace!(6, "filtered out");
    critical!(0, "critical messages carry a prefix");

    let verbosity: u8 = 3;
    debug!(verbosity, "threshold from a variable");
    debug!(verbosity + 1, "threshold from an expression with {}", "arguments");

    set_global_logging_threshold(previous);
  }
}
