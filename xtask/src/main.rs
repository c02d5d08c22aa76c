// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use sama5d2_xult::clock::{
    mhz384, mhz396, mhz528, ClockFlag, ClockIntent, ClockProfile, ClockStrategy, BootMode,
};
use sama5d2_xult::leds::LedLayout;
use sama5d2_xult::pinmap::{self, Signal};

const TARGET: &str = "armv7a-none-eabi";

#[derive(Debug, Parser)]
enum Xtask {
    /// Builds the board crate for one configuration
    Build {
        #[clap(flatten)]
        config: BoardConfig,
        #[clap(long)]
        release: bool,
    },
    /// Shows what a configuration resolves to, without building anything
    Resolve {
        #[clap(flatten)]
        config: BoardConfig,
    },
}

#[derive(Debug, clap::Args)]
struct BoardConfig {
    /// Clock setups to request. More than one is allowed; precedence decides.
    #[clap(long, value_enum)]
    clock: Vec<Clock>,
    /// Reserve the green LED for OS status reporting
    #[clap(long)]
    os_leds: bool,
    /// Alternate pin selection, e.g. `pck0=2`
    #[clap(long, value_parser = parse_pin)]
    pin: Vec<(Signal, u8)>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Clock {
    BootSdram,
    Cpu384mhz,
    Cpu396mhz,
    Cpu528mhz,
}

impl Clock {
    fn feature(self) -> &'static str {
        match self {
            Clock::BootSdram => "boot-sdram",
            Clock::Cpu384mhz => "cpu-384mhz",
            Clock::Cpu396mhz => "cpu-396mhz",
            Clock::Cpu528mhz => "cpu-528mhz",
        }
    }

    fn flag(self) -> ClockFlag {
        match self {
            Clock::BootSdram => ClockFlag::BootFromPreinitializedSdram,
            Clock::Cpu384mhz => ClockFlag::Target384Mhz,
            Clock::Cpu396mhz => ClockFlag::Target396Mhz,
            Clock::Cpu528mhz => ClockFlag::Target528Mhz,
        }
    }
}

fn parse_pin(arg: &str) -> Result<(Signal, u8)> {
    let Some((signal, n)) = arg.split_once('=') else {
        bail!("expected SIGNAL=N, got {arg:?}");
    };
    let signal = match signal {
        "pck0" => Signal::Pck0,
        "pck1" => Signal::Pck1,
        "pck2" => Signal::Pck2,
        _ => bail!("no alternate pins for {signal:?}"),
    };
    Ok((signal, n.parse()?))
}

fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::Pck0 => "pck0",
        Signal::Pck1 => "pck1",
        Signal::Pck2 => "pck2",
    }
}

impl BoardConfig {
    /// Catches the same conflicts the build would, with nicer messages.
    fn check(&self) -> Result<()> {
        for signal in Signal::ALL {
            let mut requested = vec![];
            for &(s, n) in &self.pin {
                if s != signal {
                    continue;
                }
                if n == 0 {
                    bail!("pin candidates are numbered from 1");
                }
                let n = usize::from(n);
                if requested.len() < n {
                    requested.resize(n, false);
                }
                requested[n - 1] = true;
            }
            if let Err(e) = pinmap::select(signal, &requested) {
                bail!("configuration conflict: {e}");
            }
        }
        Ok(())
    }

    fn features(&self) -> Vec<String> {
        let mut features: Vec<String> =
            self.clock.iter().map(|c| c.feature().to_string()).collect();
        if self.os_leds {
            features.push("os-leds".to_string());
        }
        for &(signal, n) in &self.pin {
            features.push(format!("{}-pin-{}", signal_name(signal), n));
        }
        features
    }

    fn intent(&self) -> ClockIntent {
        self.clock
            .iter()
            .fold(ClockIntent::NONE, |intent, c| intent.with(c.flag()))
    }
}

// Panic messages in crates have a long prefix; we shorten it using
// --remap-path-prefix to reduce message size. Local crates become /sama5d2-xult
// and crates.io sources become /crates.io.
fn remap_paths() -> BTreeMap<PathBuf, &'static str> {
    let mut remap_paths = BTreeMap::new();

    if let Ok(home) = std::env::var("CARGO_HOME") {
        let cargo_home = PathBuf::from(home);
        remap_paths.insert(cargo_home.join("git").join("checkouts"), "/git");
        remap_paths.insert(
            cargo_home
                .join("registry")
                .join("src")
                .join("index.crates.io-6f17d22bba15001f"),
            "/crates.io",
        );
    }

    if let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let mut root = PathBuf::from(dir);
        root.pop();
        remap_paths.insert(root, "/sama5d2-xult");
    }
    remap_paths
}

fn build(config: BoardConfig, release: bool) -> Result<()> {
    config.check()?;

    let remap_path_prefix = remap_paths().iter().fold(String::new(), |mut output, r| {
        let _ = write!(output, " --remap-path-prefix={}={}", r.0.display(), r.1);
        output
    });

    let cargo = std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into());
    let mut command = Command::new(cargo);
    command.args(["build", "-p", "sama5d2-xult", "--target", TARGET]);
    if release {
        command.arg("--release");
    }
    command.arg("--no-default-features");
    let features = config.features();
    if !features.is_empty() {
        command.arg("--features");
        command.arg(features.join(","));
    }
    command.env("RUSTFLAGS", remap_path_prefix.trim_start());

    let status = command
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()?
        .wait()?;

    if !status.success() {
        bail!("build failed: {}", status);
    }
    Ok(())
}

fn resolve(config: BoardConfig) -> Result<()> {
    config.check()?;

    let strategy = config.intent().resolve();
    println!("clock strategy: {strategy:?}");

    let settings = match strategy {
        ClockStrategy::PreinitializedSdram => None,
        ClockStrategy::Mhz384 => Some(mhz384::SETTINGS),
        ClockStrategy::Mhz396 => Some(mhz396::SETTINGS),
        ClockStrategy::Mhz528 => Some(mhz528::SETTINGS),
    };
    match settings {
        Some(settings) => {
            let profile = ClockProfile::new(BootMode::Direct, settings.frequencies());
            println!("{profile:#?}");
        }
        None => {
            println!("frequencies are read back from the loader's setup at boot,");
            println!("assuming a 12 MHz main crystal");
        }
    }

    let layout = LedLayout::for_reservation(config.os_leds);
    print!("application LEDs:");
    for i in 0..layout.count() {
        if let Some(slot) = layout.slot(i) {
            print!(" {i}={slot:?}");
        }
    }
    println!();
    if let Some(slot) = layout.reserved() {
        println!("OS status LED: {slot:?}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let xtask = Xtask::parse();

    match xtask {
        Xtask::Build { config, release } => build(config, release)?,
        Xtask::Resolve { config } => resolve(config)?,
    }
    Ok(())
}
