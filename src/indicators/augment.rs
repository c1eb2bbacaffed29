use crate::data::PriceTable;
use crate::indicators::{IndicatorConfig, IndicatorError, IndicatorProvider, Params};

//{NAME}_{param values joined by _}, plus _{suffix} for multi-output indicators
pub fn column_name(indicator: &str, params: &Params, suffix: Option<&str>) -> String {
    let mut name = indicator.to_uppercase();
    for value in params.values() {
        name.push('_');
        name.push_str(&value.to_string());
    }
    if let Some(suffix) = suffix {
        name.push('_');
        name.push_str(suffix);
    }
    name
}

//computes one indicator and appends its outputs (and alias) to the table;
//returns the generated column names
pub fn augment_in_place(
    table: &mut PriceTable,
    config: &IndicatorConfig,
    params: &Params,
    provider: &dyn IndicatorProvider,
) -> Result<Vec<String>, IndicatorError> {
    let output = provider.compute(table, &config.name, &config.inputs, params)?;
    let multi_output = output.len() > 1;
    let mut added = Vec::with_capacity(output.len());

    for (suffix, series) in &output {
        let column = column_name(&config.name, params, multi_output.then_some(suffix.as_str()));
        table.insert_right_aligned(&column, series)?;

        if let Some(alias) = &config.alias {
            let alias = if multi_output {
                format!("{}_{}", alias, suffix)
            } else {
                alias.clone()
            };
            table.add_alias(&alias, &column)?;
        }

        added.push(column);
    }

    Ok(added)
}

//copy-on-write variant: the caller's table is left untouched
pub fn augment(
    table: &PriceTable,
    config: &IndicatorConfig,
    params: &Params,
    provider: &dyn IndicatorProvider,
) -> Result<PriceTable, IndicatorError> {
    let mut working = table.clone();
    augment_in_place(&mut working, config, params, provider)?;
    Ok(working)
}
