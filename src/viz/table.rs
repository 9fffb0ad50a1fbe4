//! Text and LaTeX summary tables for the estimate, 4-decimal fixed point.

use crate::domain::model::DidEstimate;

/// Interval label: the conventional "95%" when z is the 1.96 default,
/// otherwise the explicit critical value.
fn confidence_label(z: f64) -> String {
    if (z - 1.96).abs() < 1e-9 {
        "95% CI".to_string()
    } else {
        format!("CI (z = {z})")
    }
}

fn latex_confidence_label(z: f64) -> String {
    if (z - 1.96).abs() < 1e-9 {
        "95\\% CI".to_string()
    } else {
        format!("CI ($z = {z}$)")
    }
}

/// Plain-text estimate summary, printed to the console and saved alongside
/// the LaTeX tables.
pub fn text_summary(estimate: &DidEstimate) -> String {
    let mut out = String::new();
    out.push_str("Difference-in-Differences Estimate\n");
    out.push_str("----------------------------------\n");
    out.push_str(&format!("Gamma hat: {:.4}\n", estimate.gamma_hat));
    out.push_str(&format!("Std Error: {:.4}\n", estimate.standard_error));
    out.push_str(&format!(
        "{}: [{:.4}, {:.4}]\n",
        confidence_label(estimate.z),
        estimate.ci_lower,
        estimate.ci_upper
    ));
    out.push_str(&format!("Treated units: {}\n", estimate.n_treated));
    out.push_str(&format!("Untreated units: {}\n", estimate.n_untreated));
    out
}

/// Log-scale LaTeX table.
pub fn latex_log_table(estimate: &DidEstimate) -> String {
    let mut out = String::new();
    out.push_str("\\begin{table}[h]\n");
    out.push_str("\\centering\n");
    out.push_str(
        "\\caption{Difference-in-Differences Estimate of the Effect of Paid Search on Revenue}\n",
    );
    out.push_str("\\begin{tabular}{lc}\n");
    out.push_str("\\hline\n");
    out.push_str(" & Log Scale \\\\\n");
    out.push_str("\\hline\n");
    out.push_str(&format!(
        "Point Estimate ($\\hat{{\\gamma}}$) & ${:.4}$ \\\\\n",
        estimate.gamma_hat
    ));
    out.push_str(&format!(
        "Standard Error & ${:.4}$ \\\\\n",
        estimate.standard_error
    ));
    out.push_str(&format!(
        "{} & $[{:.4}, \\; {:.4}]$ \\\\\n",
        latex_confidence_label(estimate.z),
        estimate.ci_lower,
        estimate.ci_upper
    ));
    out.push_str("\\hline\n");
    out.push_str("\\end{tabular}\n");
    out.push_str("\\label{tab:did}\n");
    out.push_str("\\end{table}");
    out
}

/// Variant with an added levels-scale column. The levels numbers are the
/// exponentiated log-scale numbers; a standard error does not transform
/// that way, so its levels cell stays empty.
pub fn latex_levels_table(estimate: &DidEstimate) -> String {
    let levels = estimate.levels();

    let mut out = String::new();
    out.push_str("\\begin{table}[h]\n");
    out.push_str("\\centering\n");
    out.push_str(
        "\\caption{Difference-in-Differences Estimate of the Effect of Paid Search on Revenue}\n",
    );
    out.push_str("\\begin{tabular}{lcc}\n");
    out.push_str("\\hline\n");
    out.push_str(" & Log Scale & Levels Scale \\\\\n");
    out.push_str("\\hline\n");
    out.push_str(&format!(
        "Point Estimate ($\\hat{{\\gamma}}$) & ${:.4}$ & ${:.4}$ \\\\\n",
        estimate.gamma_hat, levels.factor
    ));
    out.push_str(&format!(
        "Standard Error & ${:.4}$ & --- \\\\\n",
        estimate.standard_error
    ));
    out.push_str(&format!(
        "{} & $[{:.4}, \\; {:.4}]$ & $[{:.4}, \\; {:.4}]$ \\\\\n",
        latex_confidence_label(estimate.z),
        estimate.ci_lower,
        estimate.ci_upper,
        levels.ci_lower,
        levels.ci_upper
    ));
    out.push_str("\\hline\n");
    out.push_str("\\end{tabular}\n");
    out.push_str("\\label{tab:did-levels}\n");
    out.push_str("\\end{table}");
    out
}
