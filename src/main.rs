use anyhow::Result;
use clap::Parser;

mod bug;
mod bugid;
mod cli;
mod commit;
mod error;
mod ext;
mod fetch;
mod landed;
mod model;
mod people;
mod phabricator;
mod report;
mod util;

use crate::cli::Cli;

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  // Phase 1: normalize CLI + environment
  let cfg = cli::normalize(cli, std::env::var("PHAB_API_TOKEN").ok())?;

  // Phase 2: interrupts stop the revision loop, not the process
  report::install_interrupt_flag();

  // Phase 3: aggregate and emit
  let fetcher = fetch::Fetcher::new(&cfg.cache_dir, Box::new(fetch::HttpTransport::new()))?;
  let ctx = commit::AggregationContext::new(&cfg, fetcher);
  report::run(&ctx)
}
