use std::io::Write;

use super::{Result, Spectrum};

impl Spectrum {
    /// Write `wavelength ; absorbance` rows with a decimal comma, the layout
    /// spreadsheet applications in comma-decimal locales import directly.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "# wavelength(nm); abs")?;
        for point in &self.points {
            let line = format!("{} ; {:.6}", point.wavelength, point.absorbance).replace('.', ",");
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self).map_err(std::io::Error::from)?;
        Ok(())
    }
}
