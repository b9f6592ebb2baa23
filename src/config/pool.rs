//! Worker pool and scheduler configuration structures.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Instance name; a unique one is generated when absent.
    pub name: Option<String>,
    /// Number of worker threads.
    pub thread_count: usize,
    /// Worker thread stack size in bytes; platform default when absent.
    pub stack_size: Option<usize>,
    /// Queue capacity; `0` means unbounded.
    pub max_pending_tasks: usize,
    /// Activate the pool as part of construction.
    pub start_threads: bool,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: None,
            thread_count: num_cpus::get(),
            stack_size: None,
            max_pending_tasks: 0,
            start_threads: true,
        }
    }
}

impl WorkerPoolConfig {
    /// Default configuration: one worker per CPU, unbounded queue, started on construction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instance name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Set the worker stack size in bytes.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Bound the queue; `0` makes it unbounded.
    #[must_use]
    pub const fn with_max_pending_tasks(mut self, max_pending_tasks: usize) -> Self {
        self.max_pending_tasks = max_pending_tasks;
        self
    }

    /// Choose whether construction activates the pool.
    #[must_use]
    pub const fn with_start_threads(mut self, start_threads: bool) -> Self {
        self.start_threads = start_threads;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_count == 0 {
            return Err("thread_count must be greater than 0".into());
        }
        if self.stack_size == Some(0) {
            return Err("stack_size must be greater than 0".into());
        }
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("name must not be blank".into());
        }
        Ok(())
    }

    /// Configured name, or a generated `worker-pool-xxxxxxxx`.
    #[must_use]
    pub fn resolved_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| generated_name("worker-pool"))
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Instance name; a unique one is generated when absent.
    pub name: Option<String>,
    /// Compensate for observed delivery lateness by aiming earlier.
    pub delivery_time_adjustment: bool,
    /// Upper bound for the compensation, in milliseconds.
    pub max_delivery_shift_ms: u64,
    /// Scheduler thread stack size in bytes; platform default when absent.
    pub stack_size: Option<usize>,
    /// Activate the scheduler as part of construction.
    pub start_thread: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: None,
            delivery_time_adjustment: false,
            max_delivery_shift_ms: 100,
            stack_size: None,
            start_thread: true,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration: no drift compensation, started on construction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instance name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable or disable drift compensation.
    #[must_use]
    pub const fn with_delivery_time_adjustment(mut self, enabled: bool) -> Self {
        self.delivery_time_adjustment = enabled;
        self
    }

    /// Cap the drift compensation.
    #[must_use]
    pub const fn with_max_delivery_shift_ms(mut self, max_delivery_shift_ms: u64) -> Self {
        self.max_delivery_shift_ms = max_delivery_shift_ms;
        self
    }

    /// Set the scheduler thread stack size in bytes.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Choose whether construction activates the scheduler.
    #[must_use]
    pub const fn with_start_thread(mut self, start_thread: bool) -> Self {
        self.start_thread = start_thread;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.stack_size == Some(0) {
            return Err("stack_size must be greater than 0".into());
        }
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("name must not be blank".into());
        }
        Ok(())
    }

    /// Configured name, or a generated `scheduler-xxxxxxxx`.
    #[must_use]
    pub fn resolved_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| generated_name("scheduler"))
    }
}

/// Root configuration: one worker pool fed by one scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Worker pool settings.
    pub pool: WorkerPoolConfig,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
}

impl PlannerConfig {
    /// Validate both sections.
    ///
    /// # Errors
    ///
    /// A description of the first invalid value, prefixed with its section.
    pub fn validate(&self) -> Result<(), String> {
        self.pool
            .validate()
            .map_err(|e| format!("pool invalid: {e}"))?;
        self.scheduler
            .validate()
            .map_err(|e| format!("scheduler invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate it.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// A parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `PLANNER_*` environment variables, loading a
    /// `.env` file first if one exists.
    ///
    /// Recognized variables: `PLANNER_POOL_NAME`, `PLANNER_THREADS`,
    /// `PLANNER_STACK_SIZE`, `PLANNER_MAX_PENDING_TASKS`,
    /// `PLANNER_SCHEDULER_NAME`, `PLANNER_DELIVERY_TIME_ADJUSTMENT`,
    /// `PLANNER_MAX_DELIVERY_SHIFT_MS`.
    ///
    /// # Errors
    ///
    /// A message naming the malformed variable, or a validation message.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(name) = lookup("PLANNER_POOL_NAME") {
            cfg.pool.name = Some(name);
        }
        if let Some(v) = parse_var(&lookup, "PLANNER_THREADS")? {
            cfg.pool.thread_count = v;
        }
        if let Some(v) = parse_var(&lookup, "PLANNER_STACK_SIZE")? {
            cfg.pool.stack_size = Some(v);
            cfg.scheduler.stack_size = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "PLANNER_MAX_PENDING_TASKS")? {
            cfg.pool.max_pending_tasks = v;
        }
        if let Some(name) = lookup("PLANNER_SCHEDULER_NAME") {
            cfg.scheduler.name = Some(name);
        }
        if let Some(v) = parse_var(&lookup, "PLANNER_DELIVERY_TIME_ADJUSTMENT")? {
            cfg.scheduler.delivery_time_adjustment = v;
        }
        if let Some(v) = parse_var(&lookup, "PLANNER_MAX_DELIVERY_SHIFT_MS")? {
            cfg.scheduler.max_delivery_shift_ms = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| format!("{key}: cannot parse `{raw}`: {e}"))
        })
        .transpose()
}

fn generated_name(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}
