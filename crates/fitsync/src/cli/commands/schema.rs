//! Schema command: declared columns per record type

use crate::error::{Result, SyncError};
use crate::schema::{ColumnType, MissingPolicy, RecordType};

fn type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text => "text",
        ColumnType::Integer => "integer",
        ColumnType::Float => "float",
        ColumnType::Bool => "bool",
        ColumnType::Date => "date",
        ColumnType::Timestamp => "timestamp",
    }
}

fn missing_name(missing: MissingPolicy) -> String {
    match missing {
        MissingPolicy::Empty => String::new(),
        MissingPolicy::Zero => "0".to_string(),
        MissingPolicy::False => "false".to_string(),
        MissingPolicy::Literal(s) => format!("{s:?}"),
    }
}

/// List record types, or the columns of one
pub async fn show(record_type: Option<String>) -> Result<()> {
    let Some(id) = record_type else {
        println!("{:<28} {:<40} {}", "Record type", "Partition", "Key");
        println!("{}", "-".repeat(90));
        for record_type in RecordType::all() {
            let schema = record_type.schema();
            println!(
                "{:<28} {:<40} {}",
                record_type.id(),
                schema.relative_path().display(),
                schema.key.join(", ")
            );
        }
        return Ok(());
    };

    let record_type = RecordType::from_id(&id)
        .ok_or_else(|| SyncError::NotFound(format!("record type {id}")))?;
    let schema = record_type.schema();

    println!("{} ({})", record_type.id(), schema.relative_path().display());
    println!("Key: {}", schema.key.join(", "));
    println!("Ordered by: {}", schema.order_by);
    println!();
    println!("{:<32} {:<10} {}", "Column", "Type", "When missing");
    println!("{}", "-".repeat(56));
    for column in &schema.columns {
        println!(
            "{:<32} {:<10} {}",
            column.name,
            type_name(column.ty),
            missing_name(column.missing)
        );
    }
    Ok(())
}
