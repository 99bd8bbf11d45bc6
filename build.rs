use vergen_gitcl::{Emitter, Gitcl};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only the git metadata feeds `version_string()`; a tarball build without
    // a `.git` directory falls back to "unknown".
    let gitcl = Gitcl::builder().branch(true).sha(true).dirty(true).build();
    Emitter::default().add_instructions(&gitcl)?.emit()?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
