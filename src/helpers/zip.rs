//! Lookup of workbook parts inside the OOXML zip container

use crate::error::IngestError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Finds a part by name, ignoring case and normalising `\` separators.
    /// A missing part is `Ok(None)`, not an error.
    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, IngestError>;

    /// Opens a part as a streaming XML reader.
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, IngestError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, IngestError> {
        let wanted = name.replace('\\', "/");
        let stored = self
            .file_names()
            .find(|file_name| file_name.replace('\\', "/").eq_ignore_ascii_case(&wanted))
            .map(str::to_owned);
        let Some(stored) = stored else {
            return Ok(None);
        };
        match self.by_name(&stored) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, IngestError> {
        Ok(self
            .part(name)?
            .map(|file| XmlReader::new(BufReader::new(file))))
    }
}
