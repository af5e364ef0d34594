//! Name-based resource addresses.

const DATABASES_SEGMENT: &str = "dbs";
const COLLECTION_DEPTH: usize = 4;

/// Returns the collection-level prefix (`dbs/<db>/colls/<coll>`) of a name-based address.
///
/// Leading and trailing slashes are ignored. Addresses that do not start with
/// a database segment, or that stop above the collection level, have no
/// collection path; resource-id addresses never do.
pub fn collection_path(address: &str) -> Option<&str> {
	let trimmed = address.trim_matches('/');
	let mut segments = trimmed.split('/');
	if segments.next() != Some(DATABASES_SEGMENT) {
		return None;
	}

	let mut end = DATABASES_SEGMENT.len();
	for _ in 1..COLLECTION_DEPTH {
		let segment = segments.next().filter(|s| !s.is_empty())?;
		end += 1 + segment.len();
	}
	Some(&trimmed[..end])
}
