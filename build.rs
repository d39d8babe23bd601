use std::env;
use std::path::PathBuf;

// ffmpeg-sys-next locates FFmpeg through pkg-config everywhere except on
// Windows, where FFMPEG_DIR has to point at an install. Help vcpkg users find it.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!(
            "cargo:warning=avdemux: FFMPEG_DIR is not set; point it at an FFmpeg install (e.g. from vcpkg) to build on Windows."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if candidate.exists() {
        println!(
            "cargo:warning=avdemux: found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=avdemux: VCPKG_ROOT is set but {} does not exist.",
            candidate.display()
        );
    }
}
