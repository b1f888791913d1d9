// Extension traits over third-party types.
//
// Keep these small and generic; anything that knows about a specific upstream
// payload belongs next to the code that fetches it.

pub mod serde_json;
