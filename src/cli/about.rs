//! Program description, version, and license text.

use std::env::consts::{ARCH, OS};

pub const DESCRIPTION: &str = "Make a pizza!";

pub const EPILOG: &str = concat!("This is version ", env!("CARGO_PKG_VERSION"), " of Pizza.");

pub const COPYRIGHT_LINE: &str = "Copyright (C) 2011-2013 Chris Jerdonek. All rights reserved.";

pub const LICENSE_TEXT: &str = "\
Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are met:

* Redistributions of source code must retain the above copyright notice,
  this list of conditions and the following disclaimer.
* Redistributions in binary form must reproduce the above copyright notice,
  this list of conditions and the following disclaimer in the documentation
  and/or other materials provided with the distribution.
* The names of the copyright holders may not be used to endorse or promote
  products derived from this software without specific prior written
  permission.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS \"AS IS\"
AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE
LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR
CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF
SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS
INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN
CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE)
ARISING IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE
POSSIBILITY OF SUCH DAMAGE.
";

pub fn version_header() -> String {
    format!("Pizza {}", env!("CARGO_PKG_VERSION"))
}

/// Build and host identification, standing in for an interpreter banner
fn using_line() -> String {
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    let executable = std::env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());

    format!("Using: {ARCH}-{OS} ({profile} build)\n at {executable}")
}

/// Text printed by `--version`
pub fn version_string() -> String {
    [version_header(), using_line(), COPYRIGHT_LINE.to_string()].join("\n\n")
}

/// Text printed by `--license`
pub fn license_string() -> String {
    [
        version_header(),
        COPYRIGHT_LINE.to_string(),
        LICENSE_TEXT.to_string(),
    ]
    .join("\n\n")
}
