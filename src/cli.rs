// Command-line interface.
// Parses flags, layers them over the config file and drives one collection run.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::info;

use crate::cache::RepoCache;
use crate::collector::{CollectOptions, ProfileStats, collect};
use crate::config::Config;
use crate::error::Result;
use crate::github::{GitHubClient, QueryCount};
use crate::guard::CrashGuard;
use crate::render::{RenderValues, format_count, overwrite_svg};

#[derive(Parser, Debug)]
#[command(name = "ghtally")]
#[command(about = "Collect GitHub profile statistics and render them into SVG templates")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "USER_NAME", help = "GitHub login to collect statistics for")]
    pub login: Option<String>,

    #[arg(long, help = "Birthday for the age line (YYYY-MM-DD)")]
    pub birthday: Option<NaiveDate>,

    #[arg(long, help = "Number of annotation lines at the top of the cache file")]
    pub comment_size: Option<usize>,

    #[arg(long, help = "Directory holding the cache files")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long = "template", help = "SVG template to rewrite (repeatable)")]
    pub templates: Vec<PathBuf>,

    #[arg(long, help = "Discard the cache and rescan every repository")]
    pub force_refresh: bool,

    #[arg(long, help = "Collect and print statistics without touching templates")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Config file values with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(login) = &self.login {
            config.login = Some(login.clone());
        }
        if let Some(birthday) = self.birthday {
            config.birthday = Some(birthday);
        }
        if let Some(comment_size) = self.comment_size {
            config.comment_size = comment_size;
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = Some(cache_dir.clone());
        }
        if !self.templates.is_empty() {
            config.templates = self.templates.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.resolve_config()?;
        let login = config.login()?.to_string();

        let mut client = GitHubClient::from_env()?;
        if let Some(url) = &config.api_url {
            client = client.with_endpoint(url.clone());
        }

        let cache = RepoCache::for_identity(
            &config.resolved_cache_dir(),
            &login,
            config.comment_size,
        );
        info!("Using cache file {}", cache.path().display());
        let guard = CrashGuard::new(cache.path());
        let mut counter = QueryCount::new();
        let options = CollectOptions {
            login: &login,
            loc_affiliations: &config.loc_affiliations,
            force_refresh: self.force_refresh,
            now: Utc::now(),
        };

        let stats = guard
            .run(collect(&mut client, &mut counter, &cache, &guard, &options))
            .await?;

        let values = RenderValues::from_stats(&stats, config.birthday, options.now.date_naive());
        if self.dry_run {
            info!("Dry run, templates left untouched");
        } else {
            for template in &config.templates {
                overwrite_svg(template, &values)?;
                info!("Updated {}", template.display());
            }
        }

        let summary = Summary {
            login: &login,
            stats: &stats,
            values: &values,
            counter: &counter,
        };
        print!("{}", summary);
        let rate_limit = client.rate_limit();
        println!(
            "Rate limit: {}/{} remaining, resets {}",
            rate_limit
                .remaining
                .map_or_else(|| "?".to_string(), |n| n.to_string()),
            rate_limit.limit,
            rate_limit.reset_display()
        );
        Ok(())
    }
}

/// Plain-text run report: values, phase timings and query counts.
pub struct Summary<'a> {
    pub login: &'a str,
    pub stats: &'a ProfileStats,
    pub values: &'a RenderValues,
    pub counter: &'a QueryCount,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        writeln!(f, "Statistics for {}", self.login)?;
        writeln!(f, "  {:<26}{}", "account created:", stats.user.created_at.date_naive())?;
        for (id, value) in self.values.iter() {
            writeln!(f, "  {:<26}{}", format!("{}:", id), value)?;
        }
        writeln!(
            f,
            "  {:<26}{}",
            "contributions (1 year):",
            format_count(stats.contributions)
        )?;
        writeln!(
            f,
            "  {:<26}{}",
            "lines of code cached:",
            if stats.loc.was_fully_cached { "yes" } else { "no" }
        )?;

        writeln!(f, "Timings")?;
        for timing in &stats.timings {
            writeln!(
                f,
                "  {:<26}{:>10.4} s",
                format!("{}:", timing.label),
                timing.elapsed.as_secs_f64()
            )?;
        }
        writeln!(f, "{}", self.counter)
    }
}
