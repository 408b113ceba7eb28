use crate::error::{CoreError, Result};
use crate::models::Profile;
use crate::services::ProfileDirectory;

/// Turn the directory's answer for the current user into a usable viewer
///
/// A missing profile, or one that has not finished onboarding, stops every
/// deck and messaging operation.
pub fn require_viewer(profile: Option<Profile>) -> Result<Profile> {
    match profile {
        Some(profile) if profile.onboarded => Ok(profile),
        _ => Err(CoreError::NoCurrentViewer),
    }
}

/// Look up and validate the viewer in one step
pub async fn load_viewer(directory: &dyn ProfileDirectory, viewer_id: &str) -> Result<Profile> {
    if viewer_id.is_empty() {
        return Err(CoreError::NoCurrentViewer);
    }
    require_viewer(directory.get_profile(viewer_id).await?)
}
