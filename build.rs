use vergen_gitcl::{Build, Emitter, Gitcl};

// Emits VERGEN_BUILD_TIMESTAMP and VERGEN_GIT_{BRANCH,SHA,DIRTY} for `version.rs`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = Build::builder().build_timestamp(true).build();
    let gitcl = Gitcl::builder().branch(true).sha(true).dirty(true).build();

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&gitcl)?
        .emit()?;

    Ok(())
}
