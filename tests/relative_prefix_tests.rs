// Installs into a prefix given relative to the working directory.
// Kept in its own test binary because it changes the process cwd.

mod test_helpers;

use orbrew::catalog;
use orbrew::config::Config;
use orbrew::installer::{self, InstallOptions, InstallState};
use std::fs;
use std::path::PathBuf;
use test_helpers::TestEnvironment;

#[tokio::test]
async fn test_relative_prefix_installs_absolute_launcher() {
    let env = TestEnvironment::new();
    let archive = env.release_archive("0.8.0", &[]);
    let formula = env.localize(catalog::orchat_enterprise(), &archive);

    std::env::set_current_dir(env.temp_dir.path()).unwrap();
    let config = Config {
        home: env.home.clone(),
        ..Config::resolve(Some(PathBuf::from("./rel")), Some(env.cache.clone()))
    };
    assert!(config.prefix.is_absolute());

    let options = InstallOptions {
        ignore_dependencies: true,
        ..Default::default()
    };
    let keg = match installer::install_formula(&formula, &config, &options)
        .await
        .unwrap()
    {
        InstallState::Installed(report) => report.keg,
        InstallState::AlreadyInstalled(_) => panic!("fresh prefix"),
    };

    let wrapper = fs::read_to_string(keg.bin().join("orchat")).unwrap();
    for line in wrapper.lines().skip(1) {
        let path = line
            .split('"')
            .nth(1)
            .expect("wrapper lines quote a path");
        assert!(path.starts_with('/'), "relative path in wrapper: {line}");
    }

    let link = env.temp_dir.path().join("rel/bin/orchat");
    assert!(link.is_symlink());

    installer::uninstall(&config, "orchat-enterprise").unwrap();
    assert!(link.symlink_metadata().is_err());
}
