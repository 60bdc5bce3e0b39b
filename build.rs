// build.rs

fn main() {
    // --- Link against Xlib and the mode-setting extensions ---
    // pkg-config is tried first. If any probe fails we fall back to plain
    // linker flags and assume the libraries live in a standard search path.

    let libraries = ["x11", "xrandr", "xinerama", "xxf86vm"];

    let mut pkg_config_success = true;

    for lib in &libraries {
        if pkg_config::probe_library(lib).is_err() {
            eprintln!(
                "pkg-config failed for library '{}'. Falling back to manual linking.",
                lib
            );
            pkg_config_success = false;
            break;
        }
    }

    if !pkg_config_success {
        // --- Manual Linking Fallback ---
        println!("cargo:rustc-link-lib=X11");
        println!("cargo:rustc-link-lib=Xrandr");
        println!("cargo:rustc-link-lib=Xinerama");
        println!("cargo:rustc-link-lib=Xxf86vm");
        println!("cargo:rustc-link-search=/usr/lib");
        eprintln!(
            "Manual linking flags applied. Ensure the X11, Xrandr, Xinerama and Xxf86vm development libraries are installed."
        );
    } else {
        eprintln!("pkg-config successfully found libraries. Linking configured automatically.");
    }
}
