/// KubeRay derives the RayCluster, head service and submitter names from the RayJob name and rejects RayJobs whose
/// name is longer than this.
pub const MAX_RAY_JOB_NAME_LEN: usize = 47;

fn is_ascii_lowercase_numeric(byte: u8) -> bool {
    matches!(byte, b'a'..=b'z' | b'0'..=b'9')
}

fn is_ascii_lowercase_numeric_or_dash(byte: u8) -> bool {
    matches!(byte, b'a'..=b'z' | b'0'..=b'9' | b'-')
}

/// Returns true if the input matches the regex `^[a-z]([-a-z0-9]*[a-z0-9])?$`, see
/// https://kubernetes.io/docs/concepts/overview/working-with-objects/names/#rfc-1035-label-names.
pub fn is_rfc_1035_label(value: &(impl AsRef<[u8]> + ?Sized)) -> bool {
    fn inner(value: &[u8]) -> bool {
        match value {
            [] => false,
            [only] => only.is_ascii_lowercase(),
            [first, middle @ .., last] => {
                first.is_ascii_lowercase()
                    && middle.iter().copied().all(is_ascii_lowercase_numeric_or_dash)
                    && is_ascii_lowercase_numeric(*last)
            }
        }
    }
    inner(value.as_ref())
}

/// Returns a description of the problem if `name` can not be used as a RayJob name.
pub fn check_ray_job_name(name: &str) -> Result<(), String> {
    if !is_rfc_1035_label(name) {
        return Err(format!(
            "{name:?} is not an RFC 1035 label matching regex /^[a-z]([-a-z0-9]*[a-z0-9])?$/"
        ));
    }
    if name.len() > MAX_RAY_JOB_NAME_LEN {
        return Err(format!(
            "{name:?} is longer than {MAX_RAY_JOB_NAME_LEN} characters"
        ));
    }
    Ok(())
}

/// Config map keys may only consist of alphanumeric characters, `-`, `_` and `.`.
pub fn is_config_map_key(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.'))
}
