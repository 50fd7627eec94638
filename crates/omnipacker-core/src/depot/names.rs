/// Steam redistributable and runtime depots that many apps pull in.
pub fn is_shared_depot(depot_id: &str) -> bool {
    shared_depot_name(depot_id).is_some()
}

fn shared_depot_name(depot_id: &str) -> Option<&'static str> {
    let name = match depot_id {
        "228980" | "228989" | "228990" => "Steamworks Shared",
        "228983" | "228984" | "228986" => "DirectX",
        "228985" => "VC Redist",
        "228987" => "OpenAL",
        "1391110" => "SteamLinuxRuntime",
        "1628210" => "SteamLinuxRuntime_soldier",
        "1826330" => "SteamLinuxRuntime_sniper",
        _ => return None,
    };
    Some(name)
}

/// App that owns a shared depot, as listed under `SharedDepots` in an app manifest.
pub fn shared_depot_owner(depot_id: &str) -> &str {
    if depot_id.starts_with("2289") {
        "228980"
    } else {
        depot_id
    }
}

/// Name for a depot the downloader did not name: the game for the primary
/// depot, the known name for shared ones, `depot_<id>` otherwise.
pub fn depot_name(depot_id: &str, is_primary: bool, game_name: &str) -> String {
    if is_primary {
        return game_name.to_string();
    }
    match shared_depot_name(depot_id) {
        Some(name) => name.to_string(),
        None => format!("depot_{depot_id}"),
    }
}

/// Game name when no store lookup is available.
pub fn fallback_game_name(app_id: &str) -> String {
    format!("app_{app_id}")
}

/// Folder-safe game name: spaces become `.`, apostrophes, colons, slashes and
/// non-ASCII characters are dropped, casing is kept.
pub fn sanitize_game_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            ' ' => Some('.'),
            '\'' | ':' | '/' | '\\' => None,
            c if !c.is_ascii() => None,
            c => Some(c),
        })
        .collect()
}
