//! `vulneval init` - write a default configuration file.

use std::path::Path;

use anyhow::Result;

use vulneval::Config;

pub fn init_command(work_dir: &Path, force: bool) -> Result<()> {
    let path = Config::init(work_dir, force)?;
    println!("Config written to {}", path.display());
    println!("Set your judge API key via the env var named in [judge].api_key_env");
    Ok(())
}
