//! Tool catalog selection: whole toolkits plus individually named tools.

use std::collections::HashSet;

use crate::arcade::{ArcadeClient, ArcadeError, ToolDefinition};

/// Page size used when walking a toolkit listing.
pub const PAGE_SIZE: usize = 50;

/// What to fetch from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    /// Toolkits whose tools are all fetched
    pub toolkits: Vec<String>,
    /// Qualified names of extra tools
    pub tools: Vec<String>,
    /// Maximum number of definitions returned
    pub limit: usize,
}

/// Fetch tool definitions, deduplicated by qualified name and capped at `limit`.
///
/// Toolkits come first, in the order given, followed by individual tools.
pub async fn fetch_tools(
    client: &ArcadeClient,
    request: &CatalogRequest,
) -> Result<Vec<ToolDefinition>, ArcadeError> {
    let mut seen = HashSet::new();
    let mut tools = Vec::new();

    'toolkits: for toolkit in &request.toolkits {
        let mut offset = 0;
        loop {
            if tools.len() >= request.limit {
                break 'toolkits;
            }

            let page = client.list_tools(Some(toolkit), PAGE_SIZE, offset).await?;
            let count = page.items.len();
            for def in page.items {
                if seen.insert(def.qualified_name()) {
                    tools.push(def);
                }
            }
            offset += count;

            let exhausted = page.total_count.is_some_and(|total| offset >= total);
            if count < PAGE_SIZE || exhausted {
                break;
            }
        }
        tracing::debug!(toolkit = %toolkit, fetched = tools.len(), "Toolkit listed");
    }

    for name in &request.tools {
        if tools.len() >= request.limit {
            break;
        }
        let def = client.get_tool(name).await?;
        if seen.insert(def.qualified_name()) {
            tools.push(def);
        }
    }

    tools.truncate(request.limit);
    tracing::info!(count = tools.len(), "Tool definitions fetched");
    Ok(tools)
}
