//! The default git-backed downloader against local fixture repositories.
//!
//! These tests shell out to the system `git` binary, like the downloader
//! itself does. They use `file://` URLs so nothing touches the network.

use crate::common::{init_git_fixture, read_resolved};
use anyhow::Result;
use fetch_once::resolver::Resolver;
use tempfile::TempDir;

#[tokio::test]
async fn test_resolves_file_subpath_from_git_repo() -> Result<()> {
    let temp = TempDir::new()?;
    let repo_dir = temp.path().join("fixture");
    let url = init_git_fixture(&repo_dir)?;

    let resolver = Resolver::with_dir(temp.path().join("downloads"))?;
    let resolved = resolver
        .resolve(&format!("git::{url}//policy/enforce.rego"))
        .await?;

    assert!(resolved.exists());
    assert_ne!(resolved, repo_dir.join("policy").join("enforce.rego"));
    assert!(read_resolved(&resolved).contains("package enforce"));
    Ok(())
}

#[tokio::test]
async fn test_ref_parameter_pins_the_checkout() -> Result<()> {
    let temp = TempDir::new()?;
    let repo_dir = temp.path().join("fixture");
    let url = init_git_fixture(&repo_dir)?;

    let resolver = Resolver::with_dir(temp.path().join("downloads"))?;

    // HEAD has the updated file; the v1.0.0 tag predates the update.
    let head = resolver
        .resolve(&format!("git::{url}//policy/enforce.rego"))
        .await?;
    let pinned = resolver
        .resolve(&format!("git::{url}//policy/enforce.rego?ref=v1.0.0"))
        .await?;

    assert!(read_resolved(&head).contains("# updated"));
    assert!(!read_resolved(&pinned).contains("# updated"));

    // Different refs are distinct cache keys, so distinct directories.
    assert_ne!(head, pinned);
    Ok(())
}

#[tokio::test]
async fn test_same_base_reuses_the_clone() -> Result<()> {
    let temp = TempDir::new()?;
    let repo_dir = temp.path().join("fixture");
    let url = init_git_fixture(&repo_dir)?;

    let resolver = Resolver::with_dir(temp.path().join("downloads"))?;

    let first = resolver
        .resolve(&format!("git::{url}//policy/enforce.rego?ref=v1.0.0"))
        .await?;
    let second = resolver
        .resolve(&format!("git::{url}?ref=v1.0.0"))
        .await?;

    // Subpath and root resolutions of the same base share one directory.
    assert!(first.starts_with(&second));
    assert_eq!(resolver.cache().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_repository_fails_then_is_not_cached() -> Result<()> {
    crate::common::init_tracing();
    let temp = TempDir::new()?;
    let resolver = Resolver::with_dir(temp.path().join("downloads"))?;
    let source = format!(
        "git::file://{}//policy/enforce.rego",
        temp.path().join("no-such-repo").display()
    );

    let err = resolver.resolve(&source).await.unwrap_err();
    assert!(format!("{err:#}").contains("fetch failed"));
    assert!(resolver.cache().is_empty());
    Ok(())
}
