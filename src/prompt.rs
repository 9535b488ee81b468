//! Grounded prompt construction.
//!
//! Retrieved chunks become labeled context blocks joined by a fixed
//! delimiter, preserved in retrieval order (nearest first), wrapped in an
//! instruction that constrains the answer to the supplied context. The
//! instruction is load-bearing: it both forbids answering beyond the
//! context and mandates an explicit "cannot be determined" reply when the
//! context is insufficient. Changing or dropping it changes answer
//! quality materially.

use crate::models::Neighbor;

pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

pub fn build_prompt(question: &str, retrieved: &[Neighbor]) -> String {
    let context = retrieved
        .iter()
        .map(|n| format!("[source={} chunk={}]\n{}", n.source, n.chunk_index, n.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);

    format!(
        "You are an internal documentation assistant.\n\
         Answer strictly based on the provided CONTEXT.\n\
         If the CONTEXT does not support an answer, say that it cannot be determined from the material.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION:\n\
         {question}\n"
    )
}
