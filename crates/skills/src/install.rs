//! Writing resolved skills into their install directory.
//!
//! Installs are destructive: an existing target is removed first, there is
//! no merge. Copies skip `.git` trees and never follow or copy symlinks.

use std::path::{Component, Path, PathBuf};

use {tracing::warn, walkdir::WalkDir};

use crate::{
    error::{Error, Result},
    types::{RemoteSkill, SKILL_FILE},
};

/// Copy the skill directory `source` to `target`, replacing `target`.
pub async fn install_dir(source: &Path, target: &Path) -> Result<()> {
    let source = source.to_path_buf();
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || copy_skill_dir(&source, &target))
        .await
        .map_err(|e| Error::external("install task failed", e))?
}

/// Blocking body of [`install_dir`].
pub fn copy_skill_dir(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(Error::io(
            format!("skill source {} is not a directory", source.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }
    reject_overlap(source, target)?;
    prepare_target(target)?;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| {
            Error::external(format!("failed to walk {}", source.display()), e)
        })?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            warn!(path = %entry.path().display(), "skipping symlink in skill directory");
            continue;
        }

        let relative = entry.path().strip_prefix(source).map_err(|e| {
            Error::external(format!("unexpected path {}", entry.path().display()), e)
        })?;
        let dest = target.join(relative);

        if file_type.is_dir() {
            std::fs::create_dir_all(&dest)
                .map_err(|e| Error::io(format!("failed to create {}", dest.display()), e))?;
        } else if file_type.is_file() {
            // fs::copy carries the permission bits over.
            std::fs::copy(entry.path(), &dest).map_err(|e| {
                Error::io(
                    format!("failed to copy {} to {}", entry.path().display(), dest.display()),
                    e,
                )
            })?;
        }
    }

    tracing::info!(source = %source.display(), target = %target.display(), "installed skill directory");
    Ok(())
}

/// Materialise a fetched skill: `SKILL.md` plus its auxiliary files.
pub async fn write_remote_skill(skill: &RemoteSkill, target: &Path) -> Result<()> {
    // Validate every path before touching the filesystem.
    let files = skill
        .files
        .iter()
        .map(|(path, body)| Ok((safe_relative_path(path)?, body)))
        .collect::<Result<Vec<_>>>()?;

    let target_owned = target.to_path_buf();
    tokio::task::spawn_blocking(move || prepare_target(&target_owned))
        .await
        .map_err(|e| Error::external("install task failed", e))??;

    write_file(&target.join(SKILL_FILE), &skill.content).await?;
    for (relative, body) in files {
        write_file(&target.join(relative), body).await?;
    }

    tracing::info!(
        skill = %skill.name,
        target = %target.display(),
        files = skill.files.len(),
        "installed remote skill"
    );
    Ok(())
}

async fn write_file(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(format!("failed to create {}", parent.display()), e))?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))
}

/// Remove any existing `target` and create it with its parents.
fn prepare_target(target: &Path) -> Result<()> {
    match std::fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(target)
            .map_err(|e| Error::io(format!("failed to remove {}", target.display()), e))?,
        Ok(_) => std::fs::remove_file(target)
            .map_err(|e| Error::io(format!("failed to remove {}", target.display()), e))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => return Err(Error::io(format!("failed to inspect {}", target.display()), e)),
    }
    std::fs::create_dir_all(target)
        .map_err(|e| Error::io(format!("failed to create {}", target.display()), e))
}

/// Replacing `target` must not delete `source`, and copying must not walk
/// into its own output.
fn reject_overlap(source: &Path, target: &Path) -> Result<()> {
    let source = std::fs::canonicalize(source)
        .map_err(|e| Error::io(format!("failed to resolve {}", source.display()), e))?;
    let resolved = resolve_existing_prefix(target)?;
    if source.starts_with(&resolved) || resolved.starts_with(&source) {
        return Err(Error::UnsafePath {
            path: target.display().to_string(),
            reason: "install target overlaps the skill source",
        });
    }
    Ok(())
}

/// Canonical form of `path` even when its tail does not exist yet: the
/// nearest existing ancestor is canonicalized and the rest appended.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .map_err(|e| Error::io(format!("failed to resolve {}", path.display()), e))?;
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    loop {
        match std::fs::canonicalize(current) {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            },
            Err(_) => match (current.parent(), current.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    current = parent;
                },
                _ => return Ok(absolute),
            },
        }
    }
}

/// Accept only plain relative paths (no root, prefix or `..`).
pub fn safe_relative_path(path: &str) -> Result<PathBuf> {
    let normalized = path.replace('\\', "/");
    let candidate = Path::new(&normalized);
    let mut out = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {},
            Component::ParentDir => {
                return Err(Error::UnsafePath {
                    path: path.to_string(),
                    reason: "contains a parent-directory segment",
                });
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafePath {
                    path: path.to_string(),
                    reason: "is absolute",
                });
            },
        }
    }
    if out.as_os_str().is_empty() {
        return Err(Error::UnsafePath {
            path: path.to_string(),
            reason: "is empty",
        });
    }
    Ok(out)
}
